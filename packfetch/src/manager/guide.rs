//! Install guide written next to a finished pack.

use std::fs;
use std::path::Path;

use super::error::{ManagerError, ManagerResult};
use super::manifest::Manifest;

/// Human-readable name and download page of the loader a pack needs.
fn loader_download(loader_id: Option<&str>, game_version: &str) -> (&'static str, String) {
    match loader_id {
        Some(id) if id.starts_with("fabric") => ("Fabric", "https://fabricmc.net/use/".to_string()),
        _ => (
            "Minecraft Forge",
            format!(
                "https://files.minecraftforge.net/net/minecraftforge/forge/index_{}.html",
                game_version
            ),
        ),
    }
}

/// Render the install guide for a pack installed into `modpack_dir`.
pub fn render_guide(manifest: &Manifest, modpack_dir: &Path) -> String {
    let game_version = &manifest.minecraft.version;
    let loader_id = manifest.primary_loader().map(|l| l.id.as_str());
    let (loader_name, loader_url) = loader_download(loader_id, game_version);

    let recommended = loader_id
        .map(|id| format!(" (Recommended: {})", id))
        .unwrap_or_default();

    [
        format!("Welcome to the installation guide for {}!", manifest.name),
        String::new(),
        "To install the modpack:".to_string(),
        String::new(),
        format!(
            "1. Download and install [{} for Minecraft {}]({}).{}",
            loader_name, game_version, loader_url, recommended
        ),
        format!(
            "2. Run this version of {} from your Minecraft launcher to generate an installation folder if you haven't already.",
            loader_name
        ),
        format!(
            "3. Copy the contents of `{}` to your {} installation folder.",
            modpack_dir.display(),
            loader_name
        ),
        String::new(),
    ]
    .join("\n")
}

/// Write the install guide to `path`.
pub fn write_guide(path: &Path, manifest: &Manifest, modpack_dir: &Path) -> ManagerResult<()> {
    fs::write(path, render_guide(manifest, modpack_dir)).map_err(|e| ManagerError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::manifest::{GameTarget, ModLoader};
    use tempfile::TempDir;

    fn manifest(loader: &str) -> Manifest {
        Manifest {
            minecraft: GameTarget {
                version: "1.16.5".to_string(),
                mod_loaders: vec![ModLoader {
                    id: loader.to_string(),
                    primary: true,
                }],
            },
            name: "All the Mods 6".to_string(),
            version: Some("1.1".to_string()),
            author: None,
            files: Vec::new(),
            overrides: None,
        }
    }

    #[test]
    fn test_render_forge_guide() {
        let text = render_guide(&manifest("forge-36.1.0"), Path::new("/srv/atm6/modpack"));

        assert!(text.starts_with("Welcome to the installation guide for All the Mods 6!"));
        assert!(text.contains(
            "[Minecraft Forge for Minecraft 1.16.5](https://files.minecraftforge.net/net/minecraftforge/forge/index_1.16.5.html)"
        ));
        assert!(text.contains("(Recommended: forge-36.1.0)"));
        assert!(text.contains("`/srv/atm6/modpack`"));
    }

    #[test]
    fn test_render_fabric_guide() {
        let text = render_guide(&manifest("fabric-0.11.3"), Path::new("modpack"));
        assert!(text.contains("[Fabric for Minecraft 1.16.5](https://fabricmc.net/use/)"));
    }

    #[test]
    fn test_render_without_loader() {
        let mut m = manifest("forge");
        m.minecraft.mod_loaders.clear();

        let text = render_guide(&m, Path::new("modpack"));
        assert!(text.contains("Minecraft Forge"));
        assert!(!text.contains("Recommended"));
    }

    #[test]
    fn test_write_guide() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("README.md");

        write_guide(&path, &manifest("forge-36.1.0"), temp.path()).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("All the Mods 6"));
    }
}
