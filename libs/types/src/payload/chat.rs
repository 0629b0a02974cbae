//! Chat family

define_payload! {
    ChatListRequest {
        from: String,
    }
}

define_payload! {
    /// Channels the server knows about
    ChatListReply {
        channels: Vec<String>,
    }
}

define_payload! {
    ChatJoin {
        from: String,
        channel: String,
    }
}

define_payload! {
    ChatLeave {
        from: String,
        channel: String,
    }
}

define_payload! {
    /// Text posted to a channel; an empty channel is the global channel
    ChatChannelMessage {
        from: String,
        channel: String,
        text: String,
    }
}

define_payload! {
    ChatPrivateMessage {
        from: String,
        to: String,
        text: String,
    }
}

define_payload! {
    /// Server console line
    ChatConsoleMessage {
        from: String,
        text: String,
    }
}

define_family! {
    /// Chat traffic between players and the server console
    Chat => ChatPayload, ChatMessageType {
        ListRequest = 0 => ChatListRequest,
        ListReply = 1 => ChatListReply,
        Join = 2 => ChatJoin,
        Leave = 3 => ChatLeave,
        ChannelMessage = 4 => ChatChannelMessage,
        PrivateMessage = 5 => ChatPrivateMessage,
        ConsoleMessage = 6 => ChatConsoleMessage,
    }
}
