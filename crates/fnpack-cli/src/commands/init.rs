use std::path::Path;

use fnpack_core::config::CONFIG_FILE;

const TEMPLATE: &str = r#"[project]
# id = "your-project-id"

[functions]
# source = "functions"
# ignore = ["node_modules", ".git"]
# isolate = false
# isolate_command = ["npx", "isolate"]
# isolate_output = "isolate"
# runtime_config = "runtimeconfig.json"
"#;

/// Write a commented fnpack.toml into the current directory.
pub async fn init_project() -> anyhow::Result<()> {
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        eprintln!("{CONFIG_FILE} already exists, skipping");
        return Ok(());
    }

    std::fs::write(path, TEMPLATE)?;
    println!("Created {CONFIG_FILE}");
    println!();
    println!("Next steps:");
    println!("  1. Set [functions].source to your functions directory");
    println!("  2. Run: fnpack package");
    Ok(())
}
