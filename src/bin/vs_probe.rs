//! Decodes a single asset file and prints a one-shot summary of what
//! came out of it — group/face/bone/animation counts, nothing more.
//! Meant as a sanity-check tool while developing against a disc dump,
//! not a renderer.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use vagrant_scene::mpd::LevelScene;
use vagrant_scene::rigged::{decode_shp, decode_wep};
use vagrant_scene::seq::SeqBank;
use vagrant_scene::znd::ZndBank;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FileFamily {
    Znd,
    Mpd,
    Wep,
    Shp,
    Seq,
}

impl fmt::Display for FileFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Parser, Debug)]
#[command(name = "vs-probe")]
#[command(about = "Decodes one asset file and prints a summary")]
struct CliArgs {
    /// Which decoder to run.
    #[arg(long, value_enum)]
    family: FileFamily,

    /// Path to the asset file.
    path: PathBuf,
}

fn main() {
    env_logger::init();

    let args = CliArgs::parse();
    log::trace!("Starting with args: {:?}", args);

    let bytes = match fs::read(&args.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{}: {e}", args.path.display());
            std::process::exit(1);
        }
    };

    let summary = match args.family {
        FileFamily::Znd => ZndBank::read(&bytes).map(|bank| {
            format!("ZND: {} MPD entries, {} TIMs, wave {}", bank.mpd_table.len(), bank.tims.len(), bank.wave)
        }),
        FileFamily::Mpd => LevelScene::decode(&bytes, None).map(|mut scene| {
            scene.build(None);
            format!("MPD: {} sub-meshes", scene.meshes.len())
        }),
        FileFamily::Wep => decode_wep(&bytes).map(|model| {
            format!(
                "WEP: {} bones, {} vertices, face version {}",
                model.skeleton.bones.len(),
                model.positions.len() / 3,
                model.face_version
            )
        }),
        FileFamily::Shp => decode_shp(&bytes).map(|model| {
            format!(
                "SHP: {} bones, {} vertices, face version {}",
                model.skeleton.bones.len(),
                model.positions.len() / 3,
                model.face_version
            )
        }),
        FileFamily::Seq => SeqBank::read(&bytes)
            .map(|bank| format!("SEQ: {} animations, {} slots", bank.animations.len(), bank.slot_table.len())),
    };

    match summary {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            eprintln!("{}: {e}", args.path.display());
            std::process::exit(1);
        }
    }
}
