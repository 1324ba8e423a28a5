fn main() -> anyhow::Result<()> {
    qc_summary::cli::run()
}
