pub(crate) mod v4;
