fn main() -> anyhow::Result<()> {
    pakforge::cli::run_cli()
}
