fn main() {
    if let Err(e) = medinfer_lib::run() {
        eprintln!("medinfer: {e}");
        std::process::exit(1);
    }
}
