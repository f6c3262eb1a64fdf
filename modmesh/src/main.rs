mod cli;

fn main() {
    cli::start_cli();
}
