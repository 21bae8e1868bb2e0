//! End-to-end dispatch tests over the built-in plugin registry.

#[cfg(test)]
mod dispatch;
