#![forbid(unsafe_code)]

fn main() -> std::process::ExitCode {
    junkan_cli::main_entry()
}
