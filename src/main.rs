fn main() {
    if let Err(err) = autodash::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
