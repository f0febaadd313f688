use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::{
    assets::{self, AssetError, FlatMesh},
    gfx::{
        camera::OrbitCamera,
        context::GpuContext,
        rendering::RenderError,
        resources::{
            Arena, Light, Material, MaterialId, Mesh, MeshId, Texture, TextureId,
        },
    },
};

/// Main scene: resource arenas, lights and the camera
///
/// Meshes are drawn in insertion order. Material and texture links are
/// arena ids, so removing a material simply makes meshes that used it fall
/// back to the renderer's default material.
pub struct Scene {
    pub camera: OrbitCamera,
    pub meshes: Arena<Mesh>,
    pub materials: Arena<Material>,
    pub textures: Arena<Texture>,
    pub lights: Vec<Light>,
}

impl Scene {
    pub fn new(camera: OrbitCamera) -> Self {
        Self {
            camera,
            meshes: Arena::new(),
            materials: Arena::new(),
            textures: Arena::new(),
            lights: Vec::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.insert(texture)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Adds one mesh per flat buffer, in order.
    pub fn add_flat_meshes(&mut self, meshes: Vec<FlatMesh>) -> Vec<MeshId> {
        meshes
            .into_iter()
            .map(|data| self.add_mesh(Mesh::new(data)))
            .collect()
    }

    /// Parses an `.obj` file and adds every object in it as a mesh.
    pub fn load_objects(&mut self, path: impl AsRef<Path>) -> Result<Vec<MeshId>, AssetError> {
        let meshes = assets::try_load_obj(path)?;
        Ok(self.add_flat_meshes(meshes))
    }

    /// Parses an `.mtl` file and adds its materials in file order.
    ///
    /// `map_Kd` / `map_Ks` paths become file-backed textures linked to the
    /// material; they are decoded later, in [`Scene::upload`]. A path that
    /// already has a texture in the scene reuses it.
    pub fn load_material_library(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<MaterialId>, AssetError> {
        let records = assets::try_load_mtl(path)?;
        let mut known: HashMap<PathBuf, TextureId> = self
            .textures
            .iter()
            .filter_map(|(id, texture)| texture.path().map(|path| (path.to_path_buf(), id)))
            .collect();

        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            let mut material = Material::from_record(record);
            if let Some(map) = &record.diffuse_map {
                material.set_diffuse_texture(Some(self.file_texture(&mut known, map)));
            }
            if let Some(map) = &record.specular_map {
                material.set_specular_texture(Some(self.file_texture(&mut known, map)));
            }
            ids.push(self.add_material(material));
        }
        Ok(ids)
    }

    fn file_texture(&mut self, known: &mut HashMap<PathBuf, TextureId>, path: &Path) -> TextureId {
        if let Some(&id) = known.get(path) {
            return id;
        }
        let id = self.add_texture(Texture::from_file(path));
        known.insert(path.to_path_buf(), id);
        id
    }

    /// Loads a material library and an object file, then links each mesh
    /// to the material its `usemtl` statement names.
    ///
    /// Meshes come back in file order. A mesh naming a material the library
    /// lacks is logged and keeps no material. When two records share a name
    /// the first one wins.
    pub fn load_obj_with_materials(
        &mut self,
        obj: impl AsRef<Path>,
        mtl: impl AsRef<Path>,
    ) -> Result<Vec<MeshId>, AssetError> {
        let mut by_name: HashMap<String, MaterialId> = HashMap::new();
        for id in self.load_material_library(mtl)? {
            if let Some(name) = self.materials.get(id).and_then(Material::name) {
                by_name.entry(name.to_string()).or_insert(id);
            }
        }

        let meshes = self.load_objects(obj)?;
        for &id in &meshes {
            let Some(wanted) = self
                .meshes
                .get(id)
                .and_then(|mesh| mesh.data().material())
                .map(str::to_string)
            else {
                continue;
            };
            match by_name.get(&wanted) {
                Some(&material) => {
                    debug!("mesh {:?} uses material `{}`", id, wanted);
                    self.assign_material(id, Some(material));
                }
                None => warn!("mesh {:?} asks for unknown material `{}`", id, wanted),
            }
        }
        Ok(meshes)
    }

    /// First mesh, in insertion order, with the given object name.
    pub fn mesh_by_name(&self, name: &str) -> Option<MeshId> {
        self.meshes
            .iter()
            .find(|(_, mesh)| mesh.name() == Some(name))
            .map(|(id, _)| id)
    }

    /// First material, in insertion order, with the given `newmtl` name.
    pub fn material_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .find(|(_, material)| material.name() == Some(name))
            .map(|(id, _)| id)
    }

    /// Links `mesh` to `material`. Returns `false` if the mesh is gone.
    pub fn assign_material(&mut self, mesh: MeshId, material: Option<MaterialId>) -> bool {
        match self.meshes.get_mut(mesh) {
            Some(mesh) => {
                mesh.set_material(material);
                true
            }
            None => false,
        }
    }

    /// The material `mesh` links to, if both still exist.
    pub fn material_for(&self, mesh: &Mesh) -> Option<&Material> {
        mesh.material().and_then(|id| self.materials.get(id))
    }

    /// Uploads every mesh and texture.
    ///
    /// Mesh failures abort the upload. A texture that fails to load is
    /// logged and left unloaded, so it samples as plain white.
    pub fn upload(&mut self, ctx: &mut dyn GpuContext) -> Result<(), RenderError> {
        for (_, mesh) in self.meshes.iter_mut() {
            mesh.load(ctx)?;
        }
        for (id, texture) in self.textures.iter_mut() {
            if let Err(err) = texture.load(ctx) {
                warn!("texture {:?} left unloaded: {}", id, err);
            }
        }
        let stats = self.statistics();
        info!(
            "Uploaded {} mesh(es) ({} triangles) and {} texture(s)",
            stats.meshes, stats.triangles, stats.textures
        );
        Ok(())
    }

    /// Releases every GPU handle held by the scene's resources.
    pub fn release(&mut self, ctx: &mut dyn GpuContext) {
        for (_, mesh) in self.meshes.iter_mut() {
            mesh.unload(ctx);
        }
        for (_, texture) in self.textures.iter_mut() {
            texture.unload(ctx);
        }
    }

    pub fn statistics(&self) -> SceneStatistics {
        SceneStatistics {
            meshes: self.meshes.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
            lights: self.lights.len(),
            triangles: self.meshes.iter().map(|(_, m)| m.triangle_count()).sum(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub meshes: usize,
    pub materials: usize,
    pub textures: usize,
    pub lights: usize,
    pub triangles: usize,
}
