//! Integration tests for the full engine: firing loop, update propagation
//! through shared subnetworks, and no-loop suppression.

mod firing;
mod noloop;
mod updates;
