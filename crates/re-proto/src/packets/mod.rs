//! Packet kinds for Java Edition 1.12.2 (protocol 340).
//!
//! Play-state kinds are closed enums with an `Other` arm so that callers can
//! match exhaustively and still pass unknown ids through untouched.

/// Target protocol version (Minecraft Java 1.12.2).
pub const PROTOCOL_VERSION: i32 = 340;

/// Game version string advertised in status responses.
pub const GAME_VERSION: &str = "1.12.2";

/// Packet IDs outside the play state.
pub mod id {
    pub mod handshake {
        pub const HANDSHAKE: i32 = 0x00;
    }

    pub mod status {
        pub const REQUEST: i32 = 0x00;
        pub const RESPONSE: i32 = 0x00;
        pub const PING: i32 = 0x01;
        pub const PONG: i32 = 0x01;
    }

    pub mod login {
        // clientbound
        pub const DISCONNECT: i32 = 0x00;
        pub const ENCRYPTION_REQUEST: i32 = 0x01;
        pub const LOGIN_SUCCESS: i32 = 0x02;
        pub const SET_COMPRESSION: i32 = 0x03;
        // serverbound
        pub const LOGIN_START: i32 = 0x00;
    }

    /// `next_state` values carried by the handshake.
    pub mod next_state {
        pub const STATUS: i32 = 1;
        pub const LOGIN: i32 = 2;
    }
}

macro_rules! packet_kinds {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $id:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
            /// Any id this crate does not name.
            Other(i32),
        }

        impl $name {
            pub fn from_id(id: i32) -> Self {
                match id {
                    $($id => Self::$variant,)*
                    other => Self::Other(other),
                }
            }

            pub fn id(self) -> i32 {
                match self {
                    $(Self::$variant => $id,)*
                    Self::Other(id) => id,
                }
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::from_id(id)
            }
        }
    };
}

packet_kinds! {
    /// Server → client play packets.
    Clientbound {
        SpawnObject = 0x00,
        SpawnExperienceOrb = 0x01,
        SpawnGlobalEntity = 0x02,
        SpawnMob = 0x03,
        SpawnPainting = 0x04,
        SpawnPlayer = 0x05,
        Animation = 0x06,
        BlockBreakAnimation = 0x08,
        UpdateBlockEntity = 0x09,
        BlockChange = 0x0B,
        BossBar = 0x0C,
        ServerDifficulty = 0x0D,
        MultiBlockChange = 0x10,
        WindowItems = 0x14,
        SetSlot = 0x16,
        EntityStatus = 0x1B,
        Explosion = 0x1C,
        UnloadChunk = 0x1D,
        ChangeGameState = 0x1E,
        KeepAlive = 0x1F,
        ChunkData = 0x20,
        JoinGame = 0x23,
        Map = 0x24,
        EntityRelativeMove = 0x26,
        EntityLookAndRelativeMove = 0x27,
        EntityLook = 0x28,
        VehicleMove = 0x29,
        PlayerAbilities = 0x2C,
        PlayerListItem = 0x2E,
        PlayerPositionAndLook = 0x2F,
        UseBed = 0x30,
        DestroyEntities = 0x32,
        RemoveEntityEffect = 0x33,
        Respawn = 0x35,
        EntityHeadLook = 0x36,
        Camera = 0x39,
        HeldItemChange = 0x3A,
        EntityMetadata = 0x3C,
        AttachEntity = 0x3D,
        EntityVelocity = 0x3E,
        EntityEquipment = 0x3F,
        SetExperience = 0x40,
        UpdateHealth = 0x41,
        SetPassengers = 0x43,
        Teams = 0x44,
        SpawnPosition = 0x46,
        TimeUpdate = 0x47,
        PlayerListHeaderFooter = 0x4A,
        CollectItem = 0x4B,
        EntityTeleport = 0x4C,
        EntityProperties = 0x4E,
        EntityEffect = 0x4F,
    }
}

packet_kinds! {
    /// Client → server play packets.
    Serverbound {
        TeleportConfirm = 0x00,
        KeepAlive = 0x0B,
        PlayerPosition = 0x0D,
        PlayerPositionAndLook = 0x0E,
        PlayerLook = 0x0F,
        VehicleMove = 0x10,
        EntityAction = 0x15,
        HeldItemChange = 0x1A,
    }
}
