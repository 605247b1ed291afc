fn main() {
    if let Err(err) = promo_audit::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
