diesel::table! {
    users (id) {
        id -> Int4,
        username -> Text,
        password -> Text,
        full_name -> Text,
        is_admin -> Bool,
        kpi_iframe_url -> Nullable<Text>,
    }
}

diesel::table! {
    processes (id) {
        id -> Int4,
        name -> Text,
        category -> Text,
        icon -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    subprocesses (id) {
        id -> Int4,
        name -> Text,
        process_id -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    other_doc_types (id) {
        id -> Int4,
        name -> Text,
        icon -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    documents (id) {
        id -> Int4,
        name -> Text,
        doc_type -> Text,
        subprocess_id -> Nullable<Int4>,
        other_doc_type_id -> Nullable<Int4>,
        version -> Text,
        description -> Nullable<Text>,
        content -> Text,
        approval_date -> Timestamptz,
        approvers -> Text,
        keywords -> Array<Text>,
        active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Int4,
        document_id -> Int4,
        user_id -> Int4,
        text -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(subprocesses -> processes (process_id));
diesel::joinable!(documents -> subprocesses (subprocess_id));
diesel::joinable!(documents -> other_doc_types (other_doc_type_id));
diesel::joinable!(comments -> documents (document_id));
diesel::joinable!(comments -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    processes,
    subprocesses,
    other_doc_types,
    documents,
    comments,
);
