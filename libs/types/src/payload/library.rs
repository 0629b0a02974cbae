//! Shared content families: craft library, flags and player groups

define_payload! {
    CraftListRequest {
        folder: String,
    }
}

define_payload! {
    CraftListReply {
        folder: String,
        craft_names: Vec<String>,
    }
}

define_payload! {
    CraftRequestFile {
        folder: String,
        craft_name: String,
    }
}

define_payload! {
    CraftRespondFile {
        folder: String,
        craft_name: String,
        craft_data: Vec<u8>,
    }
}

define_payload! {
    CraftUploadFile {
        folder: String,
        craft_name: String,
        /// 0 = VAB, 1 = SPH, 2 = subassembly
        craft_type: u8,
        craft_data: Vec<u8>,
    }
}

define_payload! {
    CraftDeleteFile {
        folder: String,
        craft_name: String,
    }
}

define_family! {
    CraftLibrary => CraftLibraryPayload, CraftLibraryMessageType {
        ListRequest = 0 => CraftListRequest,
        ListReply = 1 => CraftListReply,
        RequestFile = 2 => CraftRequestFile,
        RespondFile = 3 => CraftRespondFile,
        UploadFile = 4 => CraftUploadFile,
        DeleteFile = 5 => CraftDeleteFile,
    }
}

define_payload! {
    FlagListRequest {}
}

define_payload! {
    FlagListResponse {
        flag_names: Vec<String>,
    }
}

define_payload! {
    /// PNG bytes of one flag
    FlagData {
        owner: String,
        flag_name: String,
        flag_data: Vec<u8>,
    }
}

define_payload! {
    FlagDelete {
        flag_name: String,
    }
}

define_family! {
    Flag => FlagPayload, FlagMessageType {
        ListRequest = 0 => FlagListRequest,
        ListResponse = 1 => FlagListResponse,
        FlagData = 2 => FlagData,
        FlagDelete = 3 => FlagDelete,
    }
}

define_payload! {
    GroupsListRequest {}
}

define_payload! {
    GroupsListResponse {
        group_names: Vec<String>,
    }
}

define_payload! {
    GroupsCreate {
        group_name: String,
        owner: String,
    }
}

define_payload! {
    GroupsRemove {
        group_name: String,
    }
}

define_payload! {
    GroupsUpdate {
        group_name: String,
        owner: String,
        members: Vec<String>,
        invited: Vec<String>,
    }
}

define_family! {
    Groups => GroupsPayload, GroupsMessageType {
        ListRequest = 0 => GroupsListRequest,
        ListResponse = 1 => GroupsListResponse,
        CreateGroup = 2 => GroupsCreate,
        RemoveGroup = 3 => GroupsRemove,
        GroupUpdate = 4 => GroupsUpdate,
    }
}
