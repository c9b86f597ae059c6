use foreman::app;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match app::run(args) {
        // A run that completed is exit 0 even when its final status is
        // failed; only setup errors use a non-zero exit.
        Ok(_status) => {}
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
