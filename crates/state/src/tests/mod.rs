mod index;
mod table;
