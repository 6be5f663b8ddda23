pub mod attendance;
pub mod contributions;
pub mod face_check;
pub mod geocode;
pub mod payroll;
pub mod pcb;
pub mod retention;
