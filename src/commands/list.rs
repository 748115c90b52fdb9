//! List commands implementation

use crate::backends;

/// List all available backends
pub fn list_backends() {
    println!("Supported backends:");
    println!();
    for backend in backends::available_backends() {
        println!("  {:<8} - {}", backend.name, backend.description);
        println!("  {:<8}   options: {}", "", backend.options);
    }
}
