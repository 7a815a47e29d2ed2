mod find;

pub(crate) use find::find_associated_archives;
