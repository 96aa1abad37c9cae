use std::ffi::OsStr;
use std::path::Path;

use walkdir::WalkDir;

pub fn list(gfx_dir: &Path) -> anyhow::Result<()> {
    if !gfx_dir.is_dir() {
        anyhow::bail!("Gfx directory {:?} does not exist", gfx_dir);
    }

    let mut count = 0;
    for file in WalkDir::new(gfx_dir).max_depth(1) {
        let file = file?;
        if !file.file_type().is_file() {
            continue;
        }

        let path = file.path();
        if path.extension() != Some(OsStr::new("egf")) {
            continue;
        }

        let size = path.metadata()?.len();
        println!("{} ({} bytes)", path.display(), size);
        count += 1;
    }

    println!("{} container(s) found", count);
    Ok(())
}
