fn main() {
    if let Err(err) = securevault::app::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
