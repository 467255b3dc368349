//! Material graph reconstructor.
//!
//! Rebuilds the materials of a [`MaterialManifest`] inside a host scene,
//! binds archived textures and reassigns mesh slots. Nothing here aborts:
//! every node, link or texture that cannot be rebuilt is counted in the
//! [`ReconstructionReport`] and explained by a diagnostic.

mod report;
mod substitute;

pub use report::ReconstructionReport;
pub use substitute::{AppliedSubstitution, SUBSTITUTIONS, Substitution, substitution_for};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::host::{AuthoringHost, Scene, SceneMaterial, SceneNode};
use crate::manifest::{LinkRecord, MaterialManifest, MaterialRecord, NodeRecord};
use crate::normalize::{self, CanonicalNodeType, HostVersion, SocketDirection, SocketKey};

/// Rebuild every material of `manifest` in `scene`.
///
/// Textures are loaded from `texture_dir` by their archived file names.
pub fn reconstruct(
    host: &dyn AuthoringHost,
    scene: &mut Scene,
    manifest: &MaterialManifest,
    texture_dir: &Path,
) -> ReconstructionReport {
    tracing::info!(
        "Reconstructing {} materials from {}",
        manifest.materials.len(),
        manifest.source_asset_id
    );

    let mut builder = Builder {
        host,
        version: host.version(),
        manifest,
        texture_dir,
        loaded_images: HashSet::new(),
        report: ReconstructionReport::default(),
    };

    for record in &manifest.materials {
        let material = builder.build_material(scene, record);
        if scene.materials.insert(record.name.clone(), material).is_some() {
            builder.report.materials_replaced += 1;
        }
        builder.report.materials_created += 1;
    }

    builder.assign_meshes(scene);

    let report = builder.report;
    tracing::info!("Reconstruction finished: {}", report.summary());
    report
}

/// A node as it was instantiated, keyed by its manifest name.
struct BuiltNode {
    name: String,
    type_id: String,
    substitution: Option<&'static Substitution>,
}

impl BuiltNode {
    fn socket(&self, direction: SocketDirection, key: &SocketKey, version: HostVersion) -> Option<String> {
        let key = self.substitution.map_or_else(|| key.clone(), |s| s.remap(key));
        normalize::socket_key_to_runtime(&self.type_id, direction, &key, version)
    }
}

struct Builder<'a> {
    host: &'a dyn AuthoringHost,
    version: HostVersion,
    manifest: &'a MaterialManifest,
    texture_dir: &'a Path,
    loaded_images: HashSet<String>,
    report: ReconstructionReport,
}

impl Builder<'_> {
    fn diagnose(&mut self, kind: DiagnosticKind, subject: String, message: String) {
        tracing::warn!("{subject}: {message}");
        self.report.diagnostics.push(Diagnostic::new(kind, subject, message));
    }

    fn build_material(&mut self, scene: &mut Scene, record: &MaterialRecord) -> SceneMaterial {
        let mut material = SceneMaterial::new(&record.name);
        material.use_nodes = record.uses_graph;
        let mut built: HashMap<&str, BuiltNode> = HashMap::new();

        for node_record in &record.nodes {
            let Some((mut node, substitution)) = self.instantiate(&record.name, node_record) else {
                continue;
            };
            node.location = node_record.position;
            self.apply_values(&record.name, node_record, &mut node, substitution);
            if let Some(texture) = &node_record.bound_texture_name {
                self.bind_texture(scene, &record.name, &mut node, texture);
            }
            tracing::debug!("{}: built '{}' as {}", record.name, node.name, node.type_id);

            let type_id = node.type_id.clone();
            let name = material.node_tree.add_node(node);
            built.insert(
                node_record.name.as_str(),
                BuiltNode {
                    name,
                    type_id,
                    substitution,
                },
            );
        }

        for link in &record.links {
            self.build_link(&mut material, &built, link);
        }
        material
    }

    /// Create the node for `record`, falling back to its substitution.
    fn instantiate(
        &mut self,
        material: &str,
        record: &NodeRecord,
    ) -> Option<(SceneNode, Option<&'static Substitution>)> {
        let subject = format!("{material}/{}", record.name);
        let direct = match record.canonical_type {
            CanonicalNodeType::Unknown => record.raw_type.as_deref(),
            canonical => normalize::from_canonical(canonical, self.version),
        };
        let rejection = match direct {
            Some(type_id) => match self.host.create_node(type_id, &record.name) {
                Ok(node) => {
                    self.report.nodes_created += 1;
                    return Some((node, None));
                }
                Err(e) => e.to_string(),
            },
            None => "no runtime type recorded".to_string(),
        };

        let substitute = substitution_for(record.canonical_type, record.raw_type.as_deref());
        let created = substitute.and_then(|sub| {
            let type_id = normalize::from_canonical(sub.to, self.version)?;
            self.host.create_node(type_id, &record.name).ok().map(|node| (node, sub))
        });

        match created {
            Some((node, sub)) => {
                self.report.nodes_substituted += 1;
                self.report.substitutions.push(AppliedSubstitution {
                    material: material.to_string(),
                    node: record.name.clone(),
                    from: record.canonical_type,
                    raw_type: record.raw_type.clone(),
                    to: sub.to,
                });
                self.diagnose(
                    DiagnosticKind::NodeSubstituted,
                    subject,
                    format!("{rejection}; built {} instead", sub.to),
                );
                Some((node, Some(sub)))
            }
            None => {
                self.report.nodes_skipped += 1;
                self.diagnose(DiagnosticKind::NodeSkipped, subject, rejection);
                None
            }
        }
    }

    fn apply_values(
        &mut self,
        material: &str,
        record: &NodeRecord,
        node: &mut SceneNode,
        substitution: Option<&'static Substitution>,
    ) {
        let remap = |key: &SocketKey| substitution.map_or_else(|| key.clone(), |s| s.remap(key));

        for (key, value) in &record.inputs {
            let applied = normalize::socket_key_to_runtime(&node.type_id, SocketDirection::Input, &remap(key), self.version)
                .is_some_and(|socket| node.set_input(&socket, value.clone()));
            if !applied {
                self.diagnose(
                    DiagnosticKind::InputSkipped,
                    format!("{material}/{}", record.name),
                    format!("input {key} is not available on {}", node.type_id),
                );
            }
        }
        for (key, value) in &record.outputs {
            let applied = normalize::socket_key_to_runtime(&node.type_id, SocketDirection::Output, &remap(key), self.version)
                .is_some_and(|socket| node.set_output(&socket, value.clone()));
            if !applied {
                self.diagnose(
                    DiagnosticKind::InputSkipped,
                    format!("{material}/{}", record.name),
                    format!("output value {key} is not available on {}", node.type_id),
                );
            }
        }
    }

    fn bind_texture(&mut self, scene: &mut Scene, material: &str, node: &mut SceneNode, texture_name: &str) {
        let subject = format!("{material}/{}", node.name);
        let is_image_node = normalize::to_canonical(&node.type_id)
            .is_ok_and(CanonicalNodeType::samples_image);
        let Some(texture) = self.manifest.texture(texture_name).filter(|_| is_image_node) else {
            self.report.textures_missing += 1;
            self.diagnose(
                DiagnosticKind::TextureMissing,
                subject,
                format!("texture '{texture_name}' cannot be bound to {}", node.type_id),
            );
            return;
        };

        if !self.loaded_images.contains(&texture.name) {
            let path = self.texture_dir.join(&texture.archived_filename);
            if !path.is_file() {
                self.report.textures_missing += 1;
                self.diagnose(
                    DiagnosticKind::TextureMissing,
                    subject,
                    format!("archived file {} does not exist", path.display()),
                );
                return;
            }
            let color_space = normalize::color_space_from_canonical(texture.color_interpretation);
            match self.host.load_image(&texture.name, &path, color_space) {
                Ok(image) => {
                    scene.images.insert(texture.name.clone(), image);
                    self.loaded_images.insert(texture.name.clone());
                }
                Err(e) => {
                    self.report.textures_missing += 1;
                    self.diagnose(
                        DiagnosticKind::TextureMissing,
                        subject,
                        format!("cannot load {}: {e}", path.display()),
                    );
                    return;
                }
            }
        }

        node.image = Some(texture.name.clone());
        self.report.textures_bound += 1;
    }

    fn build_link(&mut self, material: &mut SceneMaterial, built: &HashMap<&str, BuiltNode>, link: &LinkRecord) {
        let subject = format!("{}/{}", material.name, link.to_node);
        let (Some(from), Some(to)) = (built.get(link.from_node.as_str()), built.get(link.to_node.as_str())) else {
            self.report.links_skipped += 1;
            self.diagnose(
                DiagnosticKind::LinkSkipped,
                subject,
                format!("{} -> {}: endpoint node was not built", link.from_node, link.to_node),
            );
            return;
        };

        let from_socket = from.socket(SocketDirection::Output, &link.from_socket, self.version);
        let to_socket = to.socket(SocketDirection::Input, &link.to_socket, self.version);
        let result = match (from_socket, to_socket) {
            (Some(from_socket), Some(to_socket)) => material
                .node_tree
                .link(&from.name, &from_socket, &to.name, &to_socket)
                .map_err(|e| e.to_string()),
            _ => Err(format!(
                "{}.{} -> {}.{} has no runtime socket",
                link.from_node, link.from_socket, link.to_node, link.to_socket
            )),
        };
        match result {
            Ok(()) => self.report.links_created += 1,
            Err(message) => {
                self.report.links_skipped += 1;
                self.diagnose(DiagnosticKind::LinkSkipped, subject, message);
            }
        }
    }

    fn assign_meshes(&mut self, scene: &mut Scene) {
        for (mesh_name, slots) in &self.manifest.mesh_materials {
            match scene.mesh_mut(mesh_name) {
                Some(mesh) => {
                    let recorded = self.manifest.mesh_primitive_slots.get(mesh_name);
                    mesh.assign_slots(slots, recorded.map(Vec::as_slice));
                    self.report.meshes_assigned += 1;
                    self.report.slots_assigned += slots.iter().flatten().count();
                }
                None => {
                    self.report.meshes_missing += 1;
                    self.diagnose(
                        DiagnosticKind::MeshMissing,
                        mesh_name.clone(),
                        "mesh is not part of the target asset".to_string(),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract;
    use crate::host::{GltfHost, SaveOptions, SceneMesh};
    use crate::manifest::{MANIFEST_FILE_NAME, TEXTURE_DIR_NAME, load_manifest};
    use crate::normalize::CanonicalSocketName as S;
    use crate::test_support::{self, FixtureMaterial, FixtureMesh};
    use crate::value::ParamValue;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn node(name: &str, canonical_type: CanonicalNodeType) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            canonical_type,
            raw_type: None,
            position: [0.0, 0.0],
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            bound_texture_name: None,
        }
    }

    fn link(from: &str, from_socket: S, to: &str, to_socket: S) -> LinkRecord {
        LinkRecord {
            from_node: from.to_string(),
            from_socket: from_socket.into(),
            to_node: to.to_string(),
            to_socket: to_socket.into(),
        }
    }

    fn body_scene() -> Scene {
        Scene {
            meshes: vec![SceneMesh {
                name: "Body".to_string(),
                material_slots: vec![None],
                primitive_slots: vec![0],
            }],
            ..Scene::default()
        }
    }

    fn single_material(nodes: Vec<NodeRecord>, links: Vec<LinkRecord>) -> MaterialManifest {
        let mut manifest = MaterialManifest::new("asset-000000000000");
        manifest.materials.push(MaterialRecord {
            name: "Skin".to_string(),
            uses_graph: true,
            nodes,
            links,
        });
        manifest.mesh_materials.insert("Body".to_string(), vec![Some("Skin".to_string())]);
        manifest
    }

    /// Extract the standard textured fixture into `dir`.
    fn extracted(dir: &Path) -> MaterialManifest {
        let source = dir.join("source.glb");
        test_support::write_fixture_glb(
            &source,
            &[FixtureMaterial::textured("Skin", "skin_albedo", 64)],
            &[FixtureMesh::new("Body", &[Some(0)])],
        );
        extract::extract_to_dir(&GltfHost::default(), &source, &dir.join("out")).unwrap()
    }

    fn retargeted(dir: &Path) -> std::path::PathBuf {
        let target = dir.join("retargeted.glb");
        test_support::write_fixture_glb(&target, &[], &[FixtureMesh::new("Body", &[None])]);
        target
    }

    #[test]
    fn test_textured_material_scenario() {
        let temp = TempDir::new().unwrap();
        let manifest = extracted(temp.path());
        let host = GltfHost::default();
        let mut scene = host.load_scene(&retargeted(temp.path())).unwrap();

        let report = reconstruct(&host, &mut scene, &manifest, &temp.path().join("out").join(TEXTURE_DIR_NAME));

        assert_eq!(report.materials_created, 1);
        assert_eq!(report.materials_replaced, 0);
        assert_eq!(report.nodes_created, 3);
        assert_eq!(report.links_created, 2);
        assert_eq!(report.textures_bound, 1);
        assert_eq!(report.nodes_substituted, 0);
        assert!(report.is_complete(), "{:#?}", report.diagnostics);

        let mesh = scene.mesh("Body").unwrap();
        assert_eq!(mesh.material_slots, vec![Some("Skin".to_string())]);
        assert_eq!(mesh.primitive_material(0), Some("Skin"));
        assert_eq!(scene.images["skin_albedo"].color_space, "sRGB");
    }

    #[test]
    fn test_round_trip_preserves_graph() {
        let temp = TempDir::new().unwrap();
        let original = extracted(temp.path());
        let host = GltfHost::default();
        let mut scene = host.load_scene(&retargeted(temp.path())).unwrap();
        reconstruct(&host, &mut scene, &original, &temp.path().join("out").join(TEXTURE_DIR_NAME));

        let rebuilt_path = temp.path().join("rebuilt.glb");
        host.save_scene(&scene, &rebuilt_path, &SaveOptions::default()).unwrap();
        let again = extract::extract(&host, &rebuilt_path, &temp.path().join("again")).unwrap();

        assert_eq!(again.materials.len(), original.materials.len());
        for (a, b) in original.materials.iter().zip(&again.materials) {
            let types = |m: &MaterialRecord| {
                m.nodes
                    .iter()
                    .map(|n| (n.name.clone(), n.canonical_type))
                    .collect::<Vec<_>>()
            };
            assert_eq!(types(a), types(b));
            assert_eq!(a.links, b.links);
            assert_eq!(a.nodes, b.nodes);
        }
        assert_eq!(again.mesh_materials, original.mesh_materials);
        assert_eq!(again.textures[0].pixel_dimensions, [64, 64]);
    }

    #[test]
    fn test_sheen_is_substituted_on_older_hosts() {
        let mut sheen = node("Sheen BSDF", CanonicalNodeType::SheenSurface);
        sheen.inputs.insert(S::Color.into(), ParamValue::rgba([0.2, 0.3, 0.4, 1.0]));
        let manifest = single_material(
            vec![sheen, node("Material Output", CanonicalNodeType::SurfaceOutput)],
            vec![link("Sheen BSDF", S::Shader, "Material Output", S::Surface)],
        );
        let host = GltfHost::new(HostVersion::new(3, 6));
        let mut scene = body_scene();

        let report = reconstruct(&host, &mut scene, &manifest, Path::new("unused"));

        assert_eq!(report.nodes_created, 1);
        assert_eq!(report.nodes_substituted, 1);
        assert_eq!(report.links_created, 1);
        assert_eq!(report.substitutions[0].to, CanonicalNodeType::DiffuseSurface);
        let tree = &scene.materials["Skin"].node_tree;
        let diffuse = tree.node("Sheen BSDF").unwrap();
        assert_eq!(diffuse.type_id, "ShaderNodeBsdfDiffuse");
        assert_eq!(diffuse.inputs["Color"], Some(ParamValue::rgba([0.2, 0.3, 0.4, 1.0])));
        assert!(
            report
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::NodeSubstituted)
        );
    }

    #[test]
    fn test_unknown_bsdf_becomes_diffuse_and_others_are_skipped() {
        let mut toon = node("Toon BSDF", CanonicalNodeType::Unknown);
        toon.raw_type = Some("ShaderNodeBsdfToon".to_string());
        toon.inputs.insert(SocketKey::Raw("Color".to_string()), ParamValue::rgba([1.0, 0.0, 0.0, 1.0]));
        toon.inputs.insert(SocketKey::Raw("Size".to_string()), ParamValue::Scalar(0.5));
        let mut noise = node("Noise Texture", CanonicalNodeType::Unknown);
        noise.raw_type = Some("ShaderNodeTexNoise".to_string());

        let manifest = single_material(
            vec![toon, noise, node("Material Output", CanonicalNodeType::SurfaceOutput)],
            vec![
                LinkRecord {
                    from_node: "Toon BSDF".to_string(),
                    from_socket: SocketKey::Raw("BSDF".to_string()),
                    to_node: "Material Output".to_string(),
                    to_socket: S::Surface.into(),
                },
                LinkRecord {
                    from_node: "Noise Texture".to_string(),
                    from_socket: SocketKey::Raw("Fac".to_string()),
                    to_node: "Toon BSDF".to_string(),
                    to_socket: SocketKey::Raw("Size".to_string()),
                },
            ],
        );
        let host = GltfHost::default();
        let mut scene = body_scene();

        let report = reconstruct(&host, &mut scene, &manifest, Path::new("unused"));

        assert_eq!(report.nodes_created, 1);
        assert_eq!(report.nodes_substituted, 1);
        assert_eq!(report.nodes_skipped, 1);
        assert_eq!(report.links_created, 1);
        assert_eq!(report.links_skipped, 1);
        assert_eq!(report.substitutions[0].raw_type.as_deref(), Some("ShaderNodeBsdfToon"));

        let kinds: Vec<DiagnosticKind> = report.diagnostics.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiagnosticKind::NodeSkipped));
        assert!(kinds.contains(&DiagnosticKind::InputSkipped));
        assert!(kinds.contains(&DiagnosticKind::LinkSkipped));
        // The material still exists and renders through the substitute
        assert!(scene.materials["Skin"].node_tree.is_linked("Material Output", "Surface"));
    }

    #[test]
    fn test_missing_texture_leaves_node_unbound() {
        let temp = TempDir::new().unwrap();
        let manifest = extracted(temp.path());
        let textures = temp.path().join("out").join(TEXTURE_DIR_NAME);
        std::fs::remove_file(textures.join(&manifest.textures[0].archived_filename)).unwrap();

        let host = GltfHost::default();
        let mut scene = host.load_scene(&retargeted(temp.path())).unwrap();
        let report = reconstruct(&host, &mut scene, &manifest, &textures);

        assert_eq!(report.textures_missing, 1);
        assert_eq!(report.textures_bound, 0);
        assert_eq!(report.materials_created, 1);
        assert_eq!(report.nodes_created, 3);
        let image_node = scene.materials["Skin"]
            .node_tree
            .nodes
            .iter()
            .find(|n| n.type_id == "ShaderNodeTexImage")
            .unwrap();
        assert_eq!(image_node.image, None);
    }

    #[test]
    fn test_existing_materials_are_replaced_and_missing_meshes_reported() {
        let temp = TempDir::new().unwrap();
        let manifest = extracted(temp.path());
        let mut manifest = manifest;
        manifest.mesh_materials.insert("Cape".to_string(), vec![Some("Skin".to_string())]);

        let host = GltfHost::default();
        let mut scene = host.load_scene(&temp.path().join("source.glb")).unwrap();
        let report = reconstruct(&host, &mut scene, &manifest, &temp.path().join("out").join(TEXTURE_DIR_NAME));

        assert_eq!(report.materials_created, 1);
        assert_eq!(report.materials_replaced, 1);
        assert_eq!(report.meshes_assigned, 1);
        assert_eq!(report.meshes_missing, 1);
        assert_eq!(report.slots_assigned, 1);
        assert_eq!(scene.materials.len(), 1);
    }

    #[test]
    fn test_assignment_preserves_slot_counts() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("multi.glb");
        test_support::write_fixture_glb(
            &source,
            &[FixtureMaterial::plain("Cloth", [0.1, 0.2, 0.3, 1.0]), FixtureMaterial::plain("Metal", [0.9; 4])],
            &[
                FixtureMesh::new("Body", &[Some(0), Some(1)]),
                FixtureMesh::new("Belt", &[Some(1)]),
                FixtureMesh::new("Torso", &[Some(0), Some(1), Some(0)]),
                FixtureMesh::new("Arm", &[None, Some(1)]),
            ],
        );
        let out = temp.path().join("out");
        let host = GltfHost::default();
        extract::extract_to_dir(&host, &source, &out).unwrap();
        let manifest = load_manifest(&out.join(MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(manifest.mesh_materials["Arm"], vec![None, Some("Metal".to_string())]);
        assert_eq!(manifest.mesh_primitive_slots["Torso"], vec![0, 1, 0]);

        let target = temp.path().join("target.glb");
        test_support::write_fixture_glb(
            &target,
            &[],
            &[
                FixtureMesh::new("Body", &[None, None]),
                FixtureMesh::new("Belt", &[None]),
                FixtureMesh::new("Torso", &[None, None, None]),
                FixtureMesh::new("Arm", &[None, None]),
            ],
        );
        let mut scene = host.load_scene(&target).unwrap();
        let report = reconstruct(&host, &mut scene, &manifest, &out.join(TEXTURE_DIR_NAME));

        for (mesh, slots) in &manifest.mesh_materials {
            assert_eq!(&scene.mesh(mesh).unwrap().material_slots, slots, "{mesh}");
        }
        assert_eq!(report.slots_assigned, 6);

        let materials = |name: &str| {
            let mesh = scene.mesh(name).unwrap();
            (0..mesh.primitive_slots.len())
                .map(|i| mesh.primitive_material(i))
                .collect::<Vec<_>>()
        };
        assert_eq!(materials("Body"), vec![Some("Cloth"), Some("Metal")]);
        assert_eq!(materials("Torso"), vec![Some("Cloth"), Some("Metal"), Some("Cloth")]);
        assert_eq!(materials("Arm"), vec![None, Some("Metal")]);
    }
}
