fn main() {
    if let Err(err) = sheet_batcher::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
