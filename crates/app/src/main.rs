//! Entry point for the cubes mesh tool.
//! Loads an OBJ mesh, packs it for upload and optionally dumps it back out.

use std::{
    io::{self, BufWriter},
    path::PathBuf,
};

use anyhow::{Context, Result, bail};
use asset::{TextureData, load_obj_from_path, packed_bytes, write_obj};

#[derive(Debug, Default)]
struct AppConfig {
    mesh: Option<PathBuf>,
    out: Option<PathBuf>,
    texture: Option<PathBuf>,
    dump_obj: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<AppConfig> {
    // Accept: <mesh.obj> --out=FILE --texture=FILE --dump-obj
    let mut config = AppConfig::default();
    for arg in args {
        if let Some(val) = arg.strip_prefix("--out=") {
            config.out = Some(PathBuf::from(val));
        } else if let Some(val) = arg.strip_prefix("--texture=") {
            config.texture = Some(PathBuf::from(val));
        } else if arg == "--dump-obj" {
            config.dump_obj = true;
        } else if arg.starts_with("--") {
            log::warn!("Unknown option '{}', ignoring.", arg);
        } else if config.mesh.is_none() {
            config.mesh = Some(PathBuf::from(arg));
        } else {
            bail!("unexpected extra argument '{}'", arg);
        }
    }
    Ok(config)
}

fn run(config: &AppConfig) -> Result<()> {
    let Some(mesh_path) = config.mesh.as_ref() else {
        bail!("usage: app <mesh.obj> [--out=FILE] [--dump-obj] [--texture=FILE]");
    };

    let mesh = load_obj_from_path(mesh_path)
        .with_context(|| format!("loading mesh {}", mesh_path.display()))?;
    let packed = mesh.pack();
    log::info!(
        "Packed {} vertices ({} triangles) into {} floats",
        mesh.num_vertices(),
        mesh.stats().triangles(),
        packed.len()
    );

    if let Some(out) = config.out.as_ref() {
        std::fs::write(out, packed_bytes(&packed))
            .with_context(|| format!("writing packed vertices to {}", out.display()))?;
        log::info!("Wrote {} bytes to {}", packed.len() * 4, out.display());
    }

    if config.dump_obj {
        let stdout = io::stdout();
        write_obj(&mesh, BufWriter::new(stdout.lock())).context("writing OBJ to stdout")?;
    }

    if let Some(texture) = config.texture.as_ref() {
        let tex = TextureData::load(texture)?;
        log::info!(
            "Texture {}: {}x{}, {} bytes per pixel",
            texture.display(),
            tex.width,
            tex.height,
            tex.bytes_per_pixel()
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = parse_args(std::env::args().skip(1))?;
    log::debug!("Config: {:?}", config);
    run(&config)
}
