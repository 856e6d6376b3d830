const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

pub fn run() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{BOLD}{CYAN}drivebackup{RESET} {DIM}v{version}{RESET}  {DIM}─{RESET}  Mirror a local directory into a Google Drive backup folder"
    );
    println!();
    usage();
    println!();
    println!("{BOLD}Options:{RESET}");
    println!("  {GREEN}-h{RESET}, {GREEN}--help{RESET}                   Show this help message");
    println!("  {GREEN}-V{RESET}, {GREEN}--version{RESET}                Show version");
    println!();
    println!("{BOLD}Environment:{RESET}");

    let vars: &[(&str, &str)] = &[
        ("DRIVEBACKUP_ACCESS_TOKEN", "OAuth access token (overrides session file)"),
        ("DRIVEBACKUP_BACKUP_ROOT", "Remote backup folder name"),
        ("DRIVEBACKUP_LOG", "Log filter, e.g. info (RUST_LOG wins)"),
    ];
    for (name, desc) in vars {
        println!(
            "  {GREEN}{name}{RESET}  {:>width$}{DIM}{desc}{RESET}",
            "",
            width = 26usize.saturating_sub(name.len()),
        );
    }
}

pub fn usage() {
    println!("{BOLD}Usage:{RESET}  {GREEN}drivebackup{RESET} {DIM}<path_to_directory>{RESET}");
}
