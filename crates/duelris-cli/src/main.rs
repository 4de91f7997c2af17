mod command;
mod contestant;
mod schema;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
