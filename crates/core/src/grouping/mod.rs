pub mod face_group;
pub mod group;
pub mod group_by;
pub mod key_buffer;
pub mod size_group;
