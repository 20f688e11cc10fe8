//! ResourceSwap contract bindings
//!
//! Only the surface this client touches is declared. `offers` mirrors the
//! public getter of the offer struct; `active` is its last field.

use ethers::contract::abigen;

abigen!(
    ResourceSwap,
    r#"[
        function ownerOf(uint256 tokenId) external view returns (address)
        function getApproved(uint256 tokenId) external view returns (address)
        function isApprovedForAll(address owner, address operator) external view returns (bool)
        function tokenURI(uint256 tokenId) external view returns (string)
        function offers(uint256 offerId) external view returns (address offerer, uint256 offeredTokenId, uint256 requestedTokenId, bool active)
        function lastActionAt(address account) external view returns (uint256)
        function lockedUntil(address account) external view returns (uint256)
        function COOLDOWN() external view returns (uint256)
        function LOCK_DURATION() external view returns (uint256)
        function approve(address to, uint256 tokenId) external
        function cancelOffer(uint256 offerId) external
        function mintResource(string name, string category, uint8 tier, uint256 value, string uri) external returns (uint256)
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)
    ]"#,
);
