//! Container-level checks on the GLB writer output: header layout, chunk
//! alignment, pointer extraction and writer lifecycle.

use vizstream::builder::FrameBuilder;
use vizstream::io::{DirectorySource, GlbWriter, MemorySource, Source, XVIZ_GLTF_EXTENSION};
use vizstream::Frame;

fn sample_frame() -> Frame {
    let mut builder = FrameBuilder::new();
    builder
        .pose()
        .timestamp(1.0)
        .position(11.0, 22.0, 33.0)
        .orientation(0.11, 0.22, 0.33);
    builder
        .primitive("/camera")
        .image(&[0xAA, 0xBB, 0xCC, 0xDD])
        .dimensions(2, 2)
        .unwrap();
    builder.frame().unwrap()
}

/// Split a GLB blob into its parsed JSON chunk and raw BIN chunk.
fn parse_glb(glb: &[u8]) -> (serde_json::Value, Vec<u8>) {
    assert_eq!(&glb[0..4], b"glTF");
    assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
    let total = u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize;
    assert_eq!(total, glb.len(), "header total length matches blob length");

    let json_len = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
    assert_eq!(json_len % 4, 0, "JSON chunk is 4-byte aligned");
    assert_eq!(&glb[16..20], b"JSON");
    let json: serde_json::Value =
        serde_json::from_slice(&glb[20..20 + json_len]).expect("JSON chunk parses");

    let bin_start = 20 + json_len;
    let bin_len = u32::from_le_bytes(glb[bin_start..bin_start + 4].try_into().unwrap()) as usize;
    assert_eq!(bin_len % 4, 0, "BIN chunk is 4-byte aligned");
    assert_eq!(&glb[bin_start + 4..bin_start + 8], b"BIN\0");
    assert_eq!(total, bin_start + 8 + bin_len);

    (json, glb[bin_start + 8..].to_vec())
}

#[test]
fn frame_encodes_as_valid_container() {
    let mut writer = GlbWriter::new(MemorySource::new());
    writer.write_frame(&sample_frame(), None).unwrap();

    let glb = writer.source().get("2-frame.glb").expect("frame blob");
    let (json, bin) = parse_glb(glb);

    assert_eq!(json["asset"]["version"], "2");
    assert_eq!(
        json["extensionsUsed"],
        serde_json::json!([XVIZ_GLTF_EXTENSION])
    );

    let payload = &json["extensions"][XVIZ_GLTF_EXTENSION];
    // Plain strings carry the `#` escape; the image became a pointer.
    assert_eq!(payload["update_type"], "#SNAPSHOT");
    let update = &payload["updates"][0];
    assert_eq!(update["timestamp"], 1.0);
    assert_eq!(update["poses"]["/vehicle_pose"]["position"][0], 11.0);
    let image = &update["primitives"]["/camera"]["images"][0];
    assert_eq!(image["data"], "#/images/0");
    assert_eq!(image["width_px"], 2);

    // The image bytes landed in the BIN chunk through bufferView 0.
    assert_eq!(json["images"][0]["bufferView"], 0);
    assert_eq!(json["bufferViews"][0]["byteOffset"], 0);
    assert_eq!(json["bufferViews"][0]["byteLength"], 4);
    assert_eq!(json["buffers"][0]["byteLength"], bin.len());
    assert_eq!(&bin[0..4], &[0xAA, 0xBB, 0xCC, 0xDD]);
}

#[test]
fn without_extension_attaches_plain_application_key() {
    let mut writer = GlbWriter::new(MemorySource::new()).without_extension();
    writer.write_frame(&sample_frame(), None).unwrap();

    let glb = writer.source().get("2-frame.glb").expect("frame blob");
    let (json, _) = parse_glb(glb);
    assert!(json.get("extensions").is_none());
    assert!(json.get("extensionsUsed").is_none());
    assert_eq!(json["xviz"]["update_type"], "#SNAPSHOT");
}

#[test]
fn writer_lifecycle_names_and_timing_index() {
    let metadata = vizstream::MetadataBuilder::new()
        .start_time(1.0)
        .end_time(2.0)
        .stream("/vehicle_pose")
        .category(vizstream::Category::Pose)
        .build();

    let mut writer = GlbWriter::new(MemorySource::new());
    writer.write_metadata(&metadata).unwrap();
    writer.write_frame(&sample_frame(), None).unwrap();
    writer.write_frame(&sample_frame(), None).unwrap();
    writer.close().unwrap();

    let mut names: Vec<&str> = writer.source().names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["0-frame.json", "1-frame.glb", "2-frame.glb", "3-frame.glb"]
    );

    let index: serde_json::Value =
        serde_json::from_slice(writer.source().get("0-frame.json").unwrap()).unwrap();
    assert_eq!(index["start_time"], 1.0);
    assert_eq!(index["end_time"], 2.0);
    assert_eq!(
        index["timing"],
        serde_json::json!([[1.0, 1.0, 2, "2-frame"], [1.0, 1.0, 3, "3-frame"]])
    );
}

#[test]
fn closed_writer_rejects_further_frames() {
    let mut writer = GlbWriter::new(MemorySource::new());
    writer.write_frame(&sample_frame(), None).unwrap();
    writer.close().unwrap();
    assert!(writer.write_frame(&sample_frame(), None).is_err());
    // Closing again is a no-op.
    writer.close().unwrap();
}

#[test]
fn explicit_index_overrides_the_counter() {
    let mut writer = GlbWriter::new(MemorySource::new());
    writer.write_frame(&sample_frame(), Some(7)).unwrap();
    writer.write_frame(&sample_frame(), None).unwrap();
    assert!(writer.source().get("7-frame.glb").is_some());
    assert!(writer.source().get("2-frame.glb").is_some());
}

#[test]
fn directory_source_round_trips_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let source = DirectorySource::new(dir.path()).unwrap();
    let mut writer = GlbWriter::new(source);
    writer.write_frame(&sample_frame(), None).unwrap();
    writer.close().unwrap();

    let mut source = DirectorySource::new(dir.path()).unwrap();
    let glb = source.read("2-frame.glb").unwrap();
    let (json, _) = parse_glb(&glb);
    assert_eq!(
        json["extensions"][XVIZ_GLTF_EXTENSION]["update_type"],
        "#SNAPSHOT"
    );
    assert!(source.read("0-frame.json").is_ok());
}
