// ABOUTME: Build script for compile-time validation of the enabled platform set
// ABOUTME: Warns when the binary is built without any chat platform adapter

fn main() {
    // Warn if no platform features are enabled
    let has_discord = cfg!(feature = "discord");

    if !has_discord {
        println!(
            "cargo::warning=No platform features enabled. \
             `tether run` and `tether send` need an adapter. Enable: discord"
        );
    }
}
