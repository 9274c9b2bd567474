// Esquema Diesel de las tablas de referencia (igual en Postgres y SQLite).
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    ingredients (id) {
        id -> Integer,
        name -> Text,
        measurement_unit -> Text,
    }
}
diesel::table! {
    tags (id) {
        id -> Integer,
        name -> Text,
        slug -> Text,
    }
}
allow_tables_to_appear_in_same_query!(ingredients, tags);
