use std::env;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let num_args = env::args().count();
    if num_args != 2 {
        println!("Usage: listcab <path/to/data1.cab>");
        return Ok(());
    }

    let input_path = env::args().nth(1).unwrap();
    let cabinet = iscab::Cabinet::open(&input_path)
        .with_context(|| format!("Failed to open cabinet {:?}", input_path))?;
    println!("Cabinet version {}:", cabinet.version());
    let mut total_size: u64 = 0;
    for entry in cabinet.file_entries() {
        let mut notes = Vec::new();
        if entry.is_compressed() {
            notes.push("compressed");
        }
        if entry.is_split() {
            notes.push("split");
        }
        if entry.is_obfuscated() {
            notes.push("obfuscated");
        }
        println!(
            "  {:?} ({} bytes, volume {}{}{})",
            entry.name(),
            entry.uncompressed_size(),
            entry.volume(),
            if notes.is_empty() { "" } else { ", " },
            notes.join(", "),
        );
        total_size += entry.uncompressed_size() as u64;
    }
    println!("  {} bytes total", total_size);

    Ok(())
}
