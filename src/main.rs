use clap::Parser;

fn main() -> anyhow::Result<()> {
    trackpad_math_lib::run(trackpad_math_lib::config::Args::parse())
}
