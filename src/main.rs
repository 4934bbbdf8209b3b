fn main() {
    if let Err(err) = bandit_prep::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
