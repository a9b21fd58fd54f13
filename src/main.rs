fn main() {
    if let Err(err) = chipview::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
