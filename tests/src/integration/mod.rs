mod cluster;
mod consensus;
mod support;
