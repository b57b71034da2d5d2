mod bind_records;
mod index_compile;
mod property_paths;
