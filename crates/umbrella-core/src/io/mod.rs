pub mod container;
pub mod extract;

pub use container::{
    ContainerEntry, UnpackedFile, collect_dir, normalize_path, pack_dir, read_container,
    read_container_bytes, unpack_to, write_container, write_container_bytes,
};
pub use extract::{ArchiveKind, CLASSES_DIR, CLASSES_JAR, Extracted, extract_dependency, extract_main};
