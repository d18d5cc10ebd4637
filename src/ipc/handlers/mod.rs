pub mod attendance;
pub mod classes;
pub mod core;
pub mod exams;
pub mod results;
pub mod sections;
pub mod students;
pub mod subjects;
pub mod teachers;
