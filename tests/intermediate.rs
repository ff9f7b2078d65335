#![cfg(feature = "json")]

use clausewitz_save::container::{GameFamily, SavegameContainer};
use clausewitz_save::intermediate::{
    join, split, split_keys, IntermediateSavegame, PackageFormat,
};
use clausewitz_save::text::{parse, Node};
use clausewitz_save::{json, Charset, ErrorKind, FormatError};
use rstest::*;
use std::io::{Cursor, Write};
use std::path::Path;

const EU4_GAMESTATE: &[u8] = b"EU4txt
date=1444.11.11
player=\"SWE\"
displayed_country_name=\"Sverige\"
savegame_versions={
\t\"1.30.4.0\"
}
trade={
\tnode={ definitions=\"baltic_sea\" current=1.5 }
}
religion_instance_data={
\tcatholic={ papacy={ papal_state=PAP } }
}
provinces={
\t-1={ name=\"Stockholm\" owner=SWE color=rgb { 10 20 30 } }
\t-2={ name=\"\xd6sterg\xf6tland\" owner=SWE }
}
countries={
\tSWE={ human=yes treasury=100.250 }
}
active_war={ name=\"Swedish Independence\" }
active_war={ name=\"Danish Conquest\" }
";

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn eu4_container() -> SavegameContainer {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    let entries: [(&str, &[u8]); 3] = [
        ("meta", b"EU4txt\ndate=1444.11.11\ndlc_enabled=\"Art of War\"\n"),
        ("gamestate", EU4_GAMESTATE),
        ("ai", b"EU4txt\nai={ }\n"),
    ];
    for (name, data) in entries {
        writer.start_file(name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    let data = writer.finish().unwrap().into_inner();
    SavegameContainer::decode(&data, GameFamily::Eu4).unwrap()
}

#[test]
fn eu4_parts() {
    let save = IntermediateSavegame::from_container(eu4_container(), GameFamily::Eu4);
    let names: Vec<_> = save.parts().keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "active_wars",
            "ai",
            "countries",
            "gamestate",
            "meta",
            "provinces",
            "religion_data",
            "trade_nodes",
        ]
    );

    assert_eq!(save.part("active_wars").unwrap().len(), 2);
    let dlc = save.part("meta").unwrap().get_first("dlc_enabled").unwrap();
    assert!(dlc.is_array());

    let gamestate = save.part("gamestate").unwrap();
    for key in split_keys(GameFamily::Eu4) {
        assert!(!gamestate.has_key(key));
    }
}

#[rstest]
#[case(PackageFormat::Directory)]
#[case(PackageFormat::Zip)]
fn package_round_trip(#[case] format: PackageFormat) {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweden");
    let save = IntermediateSavegame::from_container(eu4_container(), GameFamily::Eu4);
    save.write(&path, format).unwrap();

    assert_eq!(path.is_dir(), format == PackageFormat::Directory);
    assert_eq!(
        IntermediateSavegame::read_version(&path).unwrap(),
        IntermediateSavegame::VERSION
    );

    let loaded = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap();
    assert_eq!(loaded, save);

    let province = loaded.part("provinces").unwrap().get_first("-2").unwrap();
    let name = province.get_first("name").unwrap().text(Charset::Windows1252).unwrap();
    assert_eq!(name, "Östergötland");
}

#[test]
fn package_json_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweden");
    let save = IntermediateSavegame::from_container(eu4_container(), GameFamily::Eu4);
    save.write(&path, PackageFormat::Directory).unwrap();

    let countries = std::fs::read(path.join("countries.json")).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&countries).unwrap();
    let expected = serde_json::json!({
        "type": "array",
        "val": [
            ["SWE", {
                "type": "array",
                "val": [["human", true], ["treasury", "100.250"]]
            }]
        ]
    });
    assert_eq!(value, expected);

    let node = json::from_slice(&countries, Charset::Windows1252).unwrap();
    assert_eq!(Some(&node), save.part("countries"));
}

fn write_version(path: &Path, format: PackageFormat, version: u32) {
    match format {
        PackageFormat::Directory => std::fs::write(path.join("version"), version.to_string()).unwrap(),
        PackageFormat::Zip => {
            let data = std::fs::read(path).unwrap();
            let mut archive = zip::ZipArchive::new(Cursor::new(data)).unwrap();
            let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
            let options = zip::write::SimpleFileOptions::default();
            for i in 0..archive.len() {
                let mut file = archive.by_index(i).unwrap();
                let name = file.name().to_string();
                writer.start_file(name.as_str(), options).unwrap();
                if name == "version" {
                    writer.write_all(version.to_string().as_bytes()).unwrap();
                } else {
                    std::io::copy(&mut file, &mut writer).unwrap();
                }
            }
            std::fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
        }
    }
}

#[rstest]
fn version_gate(
    #[values(PackageFormat::Directory, PackageFormat::Zip)] format: PackageFormat,
    #[values(0, 1, 11, 13, 100, u32::MAX)] found: u32,
) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package");
    let save = IntermediateSavegame::from_container(eu4_container(), GameFamily::Eu4);
    save.write(&path, format).unwrap();
    write_version(&path, format, found);

    assert_eq!(IntermediateSavegame::read_version(&path).unwrap(), found);
    let err = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap_err();
    match err.into_kind() {
        ErrorKind::Version { found: f, expected } => {
            assert_eq!(f, found);
            assert_eq!(expected, IntermediateSavegame::VERSION);
        }
        x => panic!("unexpected error: {:?}", x),
    }
}

#[test]
fn version_checked_before_parts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package");
    let save = IntermediateSavegame::from_container(eu4_container(), GameFamily::Eu4);
    save.write(&path, PackageFormat::Directory).unwrap();
    std::fs::write(path.join("provinces.json"), b"not json").unwrap();

    let err = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Json(_)));

    std::fs::write(path.join("version"), "3").unwrap();
    let err = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Version { found: 3, .. }));
}

#[test]
fn split_then_join_is_identity() {
    let original = parse(
        b"date=1444.11.11 player=\"SWE\" flags={ a=yes } \
          provinces={ -1={ owner=SWE } } countries={ SWE={ } } diplomacy={ }",
    )
    .unwrap();

    let keys = split_keys(GameFamily::Eu4);
    let mut root = original.clone();
    let mut parts = split(&mut root, keys);
    assert_eq!(parts.len(), 3);
    assert_eq!(root.len(), 3);

    join(&mut root, &mut parts, keys);
    assert_eq!(root, original);
}

#[test]
fn into_container_rebuilds_the_envelope() {
    let original = eu4_container();
    let save = IntermediateSavegame::from_container(original.clone(), GameFamily::Eu4);
    let container = save.into_container().unwrap();
    assert!(container.is_compressed());
    assert_eq!(container.parts().len(), 3);

    let mut out = Vec::new();
    container.encode(GameFamily::Eu4, &mut out).unwrap();
    let decoded = SavegameContainer::decode(&out, GameFamily::Eu4).unwrap();
    let gamestate = decoded.part("gamestate").unwrap();
    assert!(gamestate.has_key("provinces"));
    assert!(gamestate.has_key("trade_nodes"));
    assert_eq!(gamestate.get_first("active_wars").map(Node::len), Some(2));
    assert_eq!(decoded.part("ai"), original.part("ai"));
}

fn plain_eu4(data: &[u8]) -> IntermediateSavegame {
    let container = SavegameContainer::decode(data, GameFamily::Eu4).unwrap();
    IntermediateSavegame::from_container(container, GameFamily::Eu4)
}

#[test]
fn rewriting_a_directory_drops_old_parts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package");
    plain_eu4(b"EU4txt\ndate=1444.11.11\nprovinces={ -1={ } }")
        .write(&path, PackageFormat::Directory)
        .unwrap();
    assert!(path.join("provinces.json").is_file());

    let later = plain_eu4(b"EU4txt\ndate=1445.1.1");
    later.write(&path, PackageFormat::Directory).unwrap();
    assert!(!path.join("provinces.json").exists());

    let loaded = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap();
    let names: Vec<_> = loaded.parts().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["gamestate"]);
    assert_eq!(loaded, later);
}

#[test]
fn foreign_part_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package");
    plain_eu4(b"EU4txt\ndate=1444.11.11")
        .write(&path, PackageFormat::Directory)
        .unwrap();
    std::fs::write(path.join("galactic_object.json"), b"1").unwrap();

    let err = IntermediateSavegame::load(&path, GameFamily::Eu4).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Format(FormatError::UnexpectedPart(x)) if x == "galactic_object"
    ));
}

#[rstest]
#[case(PackageFormat::Directory)]
#[case(PackageFormat::Zip)]
fn load_selected_parts(#[case] format: PackageFormat) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sweden");
    let save = IntermediateSavegame::from_container(eu4_container(), GameFamily::Eu4);
    save.write(&path, format).unwrap();

    let partial = IntermediateSavegame::load_parts(&path, GameFamily::Eu4, &["meta", "countries"]).unwrap();
    let names: Vec<_> = partial.parts().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["countries", "meta"]);
    assert_eq!(partial.part("meta"), save.part("meta"));

    let err = IntermediateSavegame::load_parts(&path, GameFamily::Eu4, &["meta", "diplomacy"]).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Format(FormatError::MissingPart(x)) if x == "diplomacy"
    ));

    write_version(&path, format, 11);
    let err = IntermediateSavegame::load_parts(&path, GameFamily::Eu4, &["meta"]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Version { found: 11, expected: 12 }));
}

#[test]
fn corrupt_version_marker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package");
    plain_eu4(b"EU4txt\ndate=1444.11.11")
        .write(&path, PackageFormat::Directory)
        .unwrap();
    std::fs::write(path.join("version"), "twelve").unwrap();

    let err = IntermediateSavegame::read_version(&path).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Format(FormatError::InvalidVersion(x)) if x == "twelve"
    ));
}
