use std::process::ExitCode;

fn main() -> ExitCode {
    smiles_cli::run()
}
