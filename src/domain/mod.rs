// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define what the
// reader talks about: windows over a match matrix, per-example
// sizes, strategy names, errors, and the seams other layers
// plug into.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Reader error taxonomy
pub mod error;

// Location (reading window) and SizePair (valid lengths)
pub mod location;

// Host-side copy of the match matrix for CPU region search
pub mod match_grid;

// Strategy names parsed once at configuration time
pub mod variants;

// Core abstractions (traits) that other layers implement
pub mod traits;
