fn main() {
    if handle_cli_flags() {
        return;
    }

    if let Err(err) = devfeed::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("devfeed {}", devfeed::VERSION);
                return true;
            }
            "--help" | "-h" => {
                println!(
                    "devfeed — Browse your developer feed from the terminal.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n  --whois <username>   Look up a user profile and exit"
                );
                return true;
            }
            "--whois" => {
                let Some(username) = args.next() else {
                    eprintln!("error: --whois requires a username");
                    std::process::exit(2);
                };
                if let Err(err) = devfeed::app::show_user(&username) {
                    eprintln!("error: {err:?}");
                    std::process::exit(1);
                }
                return true;
            }
            _ => {}
        }
    }
    false
}
