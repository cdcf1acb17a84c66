fn main() {
    if let Err(e) = holly_drv::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
