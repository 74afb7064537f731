fn main() {
    if let Err(err) = scatter_labels::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
