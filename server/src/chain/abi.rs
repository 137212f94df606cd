//! Solidity bindings for the part of the FlightSurety app contract the
//! server talks to.

use alloy_sol_types::sol;

sol! {
    contract FlightSuretyApp {
        function REGISTRATION_FEE() external view returns (uint256);
        function registerOracle() external payable;
        function getMyIndexes() external view returns (uint8[3]);
        function isOperational() external view returns (bool);

        function submitOracleResponse(
            uint8 index,
            address airline,
            string flight,
            uint256 timestamp,
            uint8 statusCode
        ) external;

        function fetchFlightStatus(address airline, string flight, uint256 timestamp) external;

        event OracleRequest(uint8 index, address airline, string flight, uint256 timestamp);
        event FlightStatusInfo(address airline, string flight, uint256 timestamp, uint8 status);
    }
}
