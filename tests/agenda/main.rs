//! Integration tests for Layer 3: Agenda
//!
//! Firing order under salience, FIFO tie-breaks, and the focus stack.

mod ordering;
