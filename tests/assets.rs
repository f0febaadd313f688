use kiln::assets::{load_mtl, load_obj, parse_mtl, parse_obj, try_load_obj, AssetError};
use kiln::gfx::{camera::OrbitCamera, scene::Scene};

use cgmath::Vector3;

fn demo_asset(name: &str) -> String {
    format!("{}/demos/assets/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_demo_scene_flattens_per_object() {
    init_logger();
    let meshes = load_obj(demo_asset("scene.obj"));
    assert_eq!(meshes.len(), 2);

    let names: Vec<_> = meshes.iter().map(|m| m.name()).collect();
    assert_eq!(names, [Some("ground"), Some("cube")]);
    assert_eq!(meshes[0].triangle_count(), 2);
    assert_eq!(meshes[1].triangle_count(), 12);

    for mesh in &meshes {
        assert_eq!(mesh.positions().len(), 3 * mesh.vertex_count());
        assert_eq!(mesh.colors().len(), 3 * mesh.vertex_count());
        assert_eq!(mesh.texcoords().len(), 2 * mesh.vertex_count());
        assert!(mesh.colors().iter().all(|&c| c == 1.0));
    }
}

#[test]
fn test_demo_materials_in_file_order() {
    init_logger();
    let records = load_mtl(demo_asset("scene.mtl"));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name.as_deref(), Some("floor"));
    assert_eq!(records[1].specular, [0.6, 0.6, 0.6]);
    assert_eq!(records[1].specular_exponent, 64.0);
}

#[test]
fn test_missing_file_is_empty_or_io_error() {
    init_logger();
    let path = demo_asset("does_not_exist.obj");
    assert!(load_obj(&path).is_empty());
    assert!(matches!(try_load_obj(&path), Err(AssetError::Io { .. })));
}

#[test]
fn test_vertex_line_order_before_first_object_is_irrelevant() {
    let grouped = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\no tri\nf 1/1 2/2 3/3\n";
    let interleaved = "vt 0 0\nv 0 0 0\nvt 1 0\nv 1 0 0\nvt 0 1\nv 0 1 0\no tri\nf 1/1 2/2 3/3\n";

    let a = kiln::assets::parse_and_flatten(grouped).unwrap();
    let b = kiln::assets::parse_and_flatten(interleaved).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
    assert!(err.to_string().contains("line 3"), "{}", err);

    let err = parse_mtl("newmtl a\nKd 1 1\n").unwrap_err();
    assert!(err.to_string().contains("line 2"), "{}", err);
}

#[test]
fn test_scene_links_material_textures() {
    init_logger();
    let dir = std::env::temp_dir().join(format!("kiln-assets-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let mtl = dir.join("textured.mtl");
    std::fs::write(&mtl, "newmtl painted\nKd 1 1 1\nmap_Kd paint.png\nmap_Ks shine.png\n").unwrap();

    let mut scene = Scene::new(OrbitCamera::new(3.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0));
    let ids = scene.load_material_library(&mtl).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    let material = scene.materials.get(ids[0]).unwrap();
    let diffuse = scene.textures.get(material.diffuse_texture().unwrap()).unwrap();
    assert!(diffuse.path().unwrap().ends_with("paint.png"));
    assert!(material.specular_texture().is_some());
    assert_eq!(scene.textures.len(), 2);
}

#[test]
fn test_demo_objects_link_materials_by_name() {
    init_logger();
    let mut scene = Scene::new(OrbitCamera::new(3.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0));
    let meshes = scene
        .load_obj_with_materials(demo_asset("scene.obj"), demo_asset("scene.mtl"))
        .unwrap();
    assert_eq!(meshes.len(), 2);

    for (object, material) in [("ground", "floor"), ("cube", "clay")] {
        let mesh = scene.mesh_by_name(object).and_then(|id| scene.meshes.get(id)).unwrap();
        assert_eq!(mesh.data().material(), Some(material));
        assert!(mesh.material().is_some());
        assert_eq!(mesh.material(), scene.material_by_name(material));
    }
}
