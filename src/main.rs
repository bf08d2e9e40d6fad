fn main() {
    if let Err(e) = ar_preview_lib::run() {
        eprintln!("ar-preview: {e}");
        std::process::exit(1);
    }
}
