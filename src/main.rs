fn main() -> anyhow::Result<()> {
    blogdeck::cli::run()
}
