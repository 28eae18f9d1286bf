use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    // The blocking driver is the async driver with every `async` and `.await` stripped
    println!("cargo:rerun-if-changed=src/async.rs");
    let source = std::fs::read_to_string("src/async.rs")?;

    let blocking = source
        .replace("embedded_hal_async", "embedded_hal")
        .replace("async", "")
        .replace(".await", "");

    let out_dir = env::var("OUT_DIR").map_err(std::io::Error::other)?;
    let mut out_path = PathBuf::from(out_dir);
    out_path.push("de-asynced.rs");

    File::create(out_path)?.write_all(blocking.as_bytes())?;

    Ok(())
}
